fn main() {
    env_logger::init();
    if let Err(err) = tsv_tas::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
