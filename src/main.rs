fn main() {
    env_logger::init();
    inkflow::app::run();
}
