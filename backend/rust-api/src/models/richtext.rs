//! Strapi "blocks" rich text.
//!
//! Fields arrive as an array of blocks (`{type, children: [{type, text}]}`),
//! occasionally as a bare string, or not at all. Everything that reads or
//! writes rich text goes through [`RichText`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RichTextRepr")]
pub struct RichText(pub Vec<Block>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Paragraph {
        #[serde(default)]
        children: Vec<Inline>,
    },
    Heading {
        #[serde(default)]
        level: u8,
        #[serde(default)]
        children: Vec<Inline>,
    },
    Quote {
        #[serde(default)]
        children: Vec<Inline>,
    },
    Code {
        #[serde(default)]
        children: Vec<Inline>,
    },
    /// Lists, images and anything else we do not render as text
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inline {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RichTextRepr {
    Blocks(Vec<Block>),
    Plain(String),
}

impl From<RichTextRepr> for RichText {
    fn from(repr: RichTextRepr) -> Self {
        match repr {
            RichTextRepr::Blocks(blocks) => RichText(blocks),
            RichTextRepr::Plain(text) => RichText(vec![Block::paragraph(text)]),
        }
    }
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            children: vec![Inline::Text { text: text.into() }],
        }
    }

    /// Concatenated text of the block's children.
    pub fn text(&self) -> String {
        match self {
            Block::Paragraph { children }
            | Block::Heading { children, .. }
            | Block::Quote { children }
            | Block::Code { children } => children
                .iter()
                .map(|child| match child {
                    Inline::Text { text } => text.as_str(),
                    Inline::Other => "",
                })
                .collect(),
            Block::Unsupported => String::new(),
        }
    }
}

impl RichText {
    /// One paragraph per non-blank line; empty input gives no blocks.
    pub fn from_lines(text: &str) -> Self {
        RichText(
            text.split('\n')
                .filter(|line| !line.trim().is_empty())
                .map(Block::paragraph)
                .collect(),
        )
    }

    /// Like [`RichText::from_lines`] but never empty: blank input becomes a
    /// single empty paragraph, which the topic schema requires.
    pub fn from_lines_or_blank(text: &str) -> Self {
        let rich = Self::from_lines(text);
        if rich.0.is_empty() {
            RichText(vec![Block::paragraph("")])
        } else {
            rich
        }
    }

    /// Flattens every block to text, joined with `separator`.
    pub fn to_plain_text(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join(separator)
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|block| block.text().trim().is_empty())
    }
}

/// Flattens an optional rich-text field; absent fields read as "".
pub fn plain_text(field: &Option<RichText>, separator: &str) -> String {
    field
        .as_ref()
        .map(|rich| rich.to_plain_text(separator))
        .unwrap_or_default()
}
