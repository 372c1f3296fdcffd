// Live spectrum analyzer entry point

fn main() {
    if let Err(e) = live_spectrum::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
