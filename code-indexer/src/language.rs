//! The fixed allowlist of source extensions and excluded directories the
//! walk stage filters by (§4.4).

pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "target",
    ".venv",
    "dist",
    "build",
    ".idea",
    ".vscode",
    "third_party",
];

/// Source extensions for Python, JS/TS, Go, Rust, Java/Kotlin, C/C++, C#,
/// Swift, Ruby, PHP, Scala, Clojure, Elixir, Dart, Lua, R.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "go", "rs", "java", "kt", "kts", "c", "h",
    "cc", "cpp", "cxx", "hpp", "hh", "cs", "swift", "rb", "php", "scala", "clj", "cljs", "cljc",
    "ex", "exs", "dart", "lua", "r",
];

pub const MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024;

pub fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

pub fn path_is_excluded(path: &std::path::Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        EXCLUDED_DIRS.contains(&s.as_ref())
    })
}
