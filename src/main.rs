use pipeplan::cli::run;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        // Database-layer failures are internal errors (exit 2); everything
        // else is a user error (exit 1).
        let message = e.to_string();
        let internal = message.contains("database")
            || message.contains("constraint")
            || message.contains("SQLite")
            || message.contains("Failed to");

        if internal {
            // {:#} prints the whole anyhow context chain on one line
            eprintln!("Internal error: {:#}", e);
            std::process::exit(2);
        }

        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}
