//! Shared wire fixtures.
#![allow(dead_code)]

use serde_json::{json, Value};

pub fn frame(event: &str, data: &Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

pub fn progress(message: &str) -> String {
    frame("progress", &json!({"type": "progress", "message": message}))
}

pub fn success_result(output: &str) -> Value {
    json!({
        "id": "r1",
        "status": "success",
        "output": output,
        "logs": ["started", "finished"],
        "toolCalls": [
            {
                "toolName": "web-search",
                "input": {"q": "rust"},
                "output": {"hits": 3},
                "duration": 900
            }
        ],
        "duration": 4300
    })
}

pub fn done(result: Value) -> String {
    frame("done", &json!({"type": "done", "result": result}))
}

pub fn error(message: &str) -> String {
    frame("error", &json!({"message": message}))
}

/// A complete successful run: two progress frames, an ignored tool frame, done.
pub fn successful_run() -> String {
    [
        progress("Searching the web"),
        frame("tool-start", &json!({"type": "tool-start", "tool": "web-search"})),
        progress("Summarizing"),
        done(success_result("All done")),
    ]
    .concat()
}
