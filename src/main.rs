fn main() {
    if let Err(err) = parley::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
