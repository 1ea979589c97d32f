fn main() {
    if let Err(err) = mental_coach::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
