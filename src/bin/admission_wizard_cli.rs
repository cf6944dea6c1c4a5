use admission_wizard::cli::run_cli;

fn main() {
    admission_wizard::init();
    if let Err(err) = run_cli() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
