//! docket-bench: Criterion benchmark harnesses for docket.
//!
//! Covers tokenizing and walking source text, and per-file topic
//! reconciliation against the code database.

// The benchmarks themselves live in `benches/`. This crate only provides the
// shared inputs they run against.
use docket_core::{Symbol, Topic, TokenizerConfig};
use docket_tokenizer::{LineBoundsMode, TokenType, Tokenizer};

/// Generate C#-style source with one documented function per block.
///
/// Each block is seven lines: a four line comment, the signature, the body
/// and the closing brace. Comments are indented with a mix of tabs and
/// spaces so indent calculation has something to do.
pub fn sample_source(functions: usize) -> String {
    let mut source = String::with_capacity(functions * 160);
    source.push_str("namespace Widgets\r\n{\r\n");
    for i in 0..functions {
        let indent = if i % 2 == 0 { "\t" } else { "    " };
        source.push_str(&format!(
            "{indent}// Function: Draw{i}\n\
             {indent}// Draws widget number {i} onto the canvas.\n\
             {indent}//\n\
             {indent}// Returns: true if anything was drawn (int)\n\
             {indent}public bool Draw{i} (int x, int y)\n\
             {indent}{{ return x + y > {i}; }}\n\
             {indent}\n"
        ));
    }
    source.push_str("}\r\n");
    source
}

/// Tokenize `text` with the tab width from `config`.
pub fn tokenize(text: &str, config: &TokenizerConfig) -> Tokenizer {
    Tokenizer::new(text).with_config(config)
}

/// A minimal comment pass: mark `//` as comment symbols and collect the
/// title after every `Function:` keyword.
pub fn mark_comments(tokenizer: &Tokenizer) -> Vec<String> {
    let mut titles = Vec::new();
    let mut line = tokenizer.first_line();
    while line.is_in_bounds() {
        let start = line.first_token(LineBoundsMode::ExcludeWhitespace);
        if start.matches_across_tokens("//", false)
            && start
                .change_type_by_characters(TokenType::CommentSymbol, 2)
                .is_ok()
        {
            if let Some(mut keyword) =
                line.find_across_tokens("Function:", true, LineBoundsMode::CommentContent)
            {
                // Function, :, whitespace, title
                keyword.next_by(3);
                titles.push(keyword.text().to_string());
            }
        }
        line.next();
    }
    titles
}

/// A topic as a parser would produce it for function `i` of
/// [`sample_source`], before it has any IDs.
pub fn make_topic(file_id: u32, i: usize, first_line: u32) -> Topic {
    let mut topic = Topic::new();
    topic.file_id = file_id;
    topic.language_id = 1;
    topic.topic_type_id = 1;
    topic.title = Some(format!("Draw{i}"));
    topic.body = Some(format!("<p>Draws widget number {i} onto the canvas.</p>"));
    topic.symbol = Symbol::from_plain_text(&format!("Widgets.Draw{i}"));
    topic.set_comment_line_number(first_line + 7 * i as u32);
    topic.set_code_line_number(first_line + 7 * i as u32 + 4);
    topic
}

/// Topics for every function of one file, starting at `first_line`.
pub fn make_file_topics(file_id: u32, functions: usize, first_line: u32) -> Vec<Topic> {
    (0..functions)
        .map(|i| make_topic(file_id, i, first_line))
        .collect()
}
