fn main() {
    if let Err(err) = stage_funnel::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
