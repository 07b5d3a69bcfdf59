/// Outline with `sections` top-level items, each holding `depth` nested levels
pub fn generate_outline(sections: usize, depth: usize) -> String {
    let mut lines = Vec::new();
    for section in 0..sections {
        for level in 0..depth {
            lines.push(format!(
                "{}- section {section} level {level} with some realistic text to select across",
                "  ".repeat(level)
            ));
        }
    }
    lines.join("\n")
}
