//! Purpose: Render pretty JSON with optional ANSI colorization for CLI output.
//! Exports: colorize_json.
//! Role: Pure formatter used when stdout is a terminal (records, reports, summaries).
//! Invariants: When color is disabled, output equals serde_json::to_string_pretty.
//! Invariants: ANSI escapes appear only when explicitly enabled.
use serde_json::{Map, Value};

const INDENT: &str = "  ";

#[derive(Clone, Copy)]
enum Role {
    Key,
    Text,
    Number,
    Bool,
    Null,
    Punct,
}

impl Role {
    // 8/16-color codes only; bright variants wash out on light themes.
    fn code(self) -> &'static str {
        match self {
            Role::Key => "36",
            Role::Text => "32",
            Role::Number => "33",
            Role::Bool => "35",
            Role::Null => "90",
            Role::Punct => "39",
        }
    }
}

struct Painter {
    color: bool,
    out: String,
}

impl Painter {
    fn paint(&mut self, text: &str, role: Role) {
        if self.color {
            self.out.push_str("\u{1b}[");
            self.out.push_str(role.code());
            self.out.push('m');
            self.out.push_str(text);
            self.out.push_str("\u{1b}[0m");
        } else {
            self.out.push_str(text);
        }
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }

    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.paint("null", Role::Null),
            Value::Bool(flag) => self.paint(if *flag { "true" } else { "false" }, Role::Bool),
            Value::Number(number) => self.paint(&number.to_string(), Role::Number),
            Value::String(text) => self.paint(&quote(text), Role::Text),
            Value::Array(items) => self.array(items, depth),
            Value::Object(map) => self.object(map, depth),
        }
    }

    fn array(&mut self, items: &[Value], depth: usize) {
        if items.is_empty() {
            self.paint("[]", Role::Punct);
            return;
        }
        self.paint("[", Role::Punct);
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.paint(",", Role::Punct);
            }
            self.newline(depth + 1);
            self.value(item, depth + 1);
        }
        self.newline(depth);
        self.paint("]", Role::Punct);
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        if map.is_empty() {
            self.paint("{}", Role::Punct);
            return;
        }
        self.paint("{", Role::Punct);
        for (idx, (key, value)) in map.iter().enumerate() {
            if idx > 0 {
                self.paint(",", Role::Punct);
            }
            self.newline(depth + 1);
            self.paint(&quote(key), Role::Key);
            self.paint(":", Role::Punct);
            self.out.push(' ');
            self.value(value, depth + 1);
        }
        self.newline(depth);
        self.paint("}", Role::Punct);
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn colorize_json(value: &Value, use_color: bool) -> String {
    let mut painter = Painter {
        color: use_color,
        out: String::new(),
    };
    painter.value(value, 0);
    painter.out
}
