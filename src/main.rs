fn main() {
    if let Err(err) = plot_server_rs::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
