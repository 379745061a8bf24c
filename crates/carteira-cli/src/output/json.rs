use crate::output::Payload;

/// Pretty-print the full computation envelope as JSON.
pub fn print_json(payload: &Payload) {
    let serialized = match payload {
        Payload::Allocation(env) => serde_json::to_string_pretty(env),
        Payload::Frontier(env) => serde_json::to_string_pretty(env),
    };
    match serialized {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}
