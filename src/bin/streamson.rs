fn main() {
    if let Err(err) = streamson::cli::run() {
        eprintln!("streamson: {err}");
        std::process::exit(1);
    }
}
