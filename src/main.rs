fn main() {
    if let Err(err) = aep_indicators::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
