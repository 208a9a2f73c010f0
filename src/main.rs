fn main() {
    if let Err(err) = gesturelock_lib::run() {
        eprintln!("gesturelock: {err:#}");
        std::process::exit(1);
    }
}
