fn main() {
    if let Err(err) = charchat::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
