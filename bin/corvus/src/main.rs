fn main() {
    if let Err(err) = corvus::cli::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
