//! Language built-in skip lists for call resolution, grounded on
//! `original_source/api/services/graph_construction_service.py`'s
//! `_BUILTIN_CALLS` table.

const PYTHON_BUILTINS: &[&str] = &[
    "len", "print", "range", "str", "int", "float", "bool", "list", "dict", "set", "tuple",
    "isinstance", "issubclass", "super", "type", "getattr", "setattr", "hasattr", "delattr",
    "enumerate", "zip", "map", "filter", "sorted", "reversed", "sum", "min", "max", "abs",
    "round", "open", "iter", "next", "format", "repr", "id", "hash", "vars", "dir", "callable",
    "Exception", "ValueError", "TypeError", "KeyError", "IndexError", "AttributeError",
    "RuntimeError", "StopIteration", "NotImplementedError", "ImportError", "FileNotFoundError",
    "OSError", "ZeroDivisionError",
];

const JS_TS_BUILTINS: &[&str] = &[
    "console.log", "console.error", "console.warn", "console.info", "console.debug",
    "parseInt", "parseFloat", "isNaN", "isFinite", "encodeURIComponent", "decodeURIComponent",
    "JSON.stringify", "JSON.parse", "Object.keys", "Object.values", "Object.entries",
    "Object.assign", "Object.freeze", "Array.isArray", "Array.from", "Promise.all",
    "Promise.resolve", "Promise.reject", "Promise.race", "setTimeout", "setInterval",
    "clearTimeout", "clearInterval", "Error", "TypeError", "RangeError", "SyntaxError",
    "Map", "Set", "Symbol", "Number", "String", "Boolean",
];

/// Whether `name` is a language built-in that the resolution ladder skips
/// outright, the first step of the resolution ladder.
#[must_use]
pub fn is_builtin(language: &str, name: &str) -> bool {
    match language {
        "python" => PYTHON_BUILTINS.contains(&name),
        "typescript" | "javascript" | "tsx" | "jsx" => JS_TS_BUILTINS.contains(&name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_builtins_recognized() {
        assert!(is_builtin("python", "len"));
        assert!(is_builtin("python", "ValueError"));
        assert!(!is_builtin("python", "my_custom_function"));
    }

    #[test]
    fn js_builtins_recognized() {
        assert!(is_builtin("typescript", "console.log"));
        assert!(is_builtin("javascript", "JSON.stringify"));
        assert!(!is_builtin("typescript", "fetchUserData"));
    }

    #[test]
    fn unknown_language_never_matches() {
        assert!(!is_builtin("rust", "println"));
    }
}
