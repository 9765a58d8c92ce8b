fn main() {
    if let Err(err) = pd_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
