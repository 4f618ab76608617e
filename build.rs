fn main() {
    // Rebuild when the fluid kernels change
    println!("cargo:rerun-if-changed=shaders");
}
