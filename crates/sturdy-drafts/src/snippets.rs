//! Per-language starter code used when no draft exists for a problem.

/// Returns the canned starter snippet for an editor language, if one is
/// defined. Lookup is case-insensitive.
pub fn default_snippet(language: &str) -> Option<&'static str> {
    match language.to_ascii_lowercase().as_str() {
        "python" => Some("# Write your solution here\n\n\ndef solve():\n    pass\n"),
        "c" => Some("#include <stdio.h>\n\nint main(void) {\n    return 0;\n}\n"),
        "cpp" | "c++" => Some(
            "#include <bits/stdc++.h>\nusing namespace std;\n\nint main() {\n    return 0;\n}\n",
        ),
        "java" => Some(
            "public class Main {\n    public static void main(String[] args) {\n    }\n}\n",
        ),
        "javascript" => Some("// Write your solution here\n\nfunction solve() {\n}\n"),
        _ => None,
    }
}
