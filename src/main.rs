use std::process::exit;

fn main() {
    if let Err(e) = ledgerdesk::app::run_cli() {
        if !e.is_empty() {
            eprintln!("{e}");
        }
        exit(1);
    }
}
