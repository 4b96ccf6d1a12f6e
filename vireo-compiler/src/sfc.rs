use pest::Parser;
use pest::iterators::Pair;
use serde::Serialize;
use thiserror::Error;

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
struct SfcParser;

#[derive(Debug, Error)]
pub enum SfcError {
    #[error("invalid single-file component:\n{0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("empty single-file component")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attr {
    pub name: String,
    /// `None` for boolean attributes such as `scoped` or `setup`.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Block {
    pub attrs: Vec<Attr>,
    pub content: String,
}

impl Block {
    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// `lang="..."`, if given.
    pub fn lang(&self) -> Option<&str> {
        self.attr("lang").and_then(|a| a.value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Sfc {
    pub template: Option<Block>,
    pub script: Option<Block>,
    pub script_setup: Option<Block>,
    pub styles: Vec<Block>,
}

pub fn parse_sfc(source: &str) -> Result<Sfc, SfcError> {
    let mut sfc = Sfc::default();

    let mut pairs = SfcParser::parse(Rule::file, source).map_err(Box::new)?;
    let file = pairs.next().ok_or(SfcError::Empty)?;

    for node in file.into_inner() {
        if node.as_rule() != Rule::block {
            continue;
        }
        for inner in node.into_inner() {
            let rule = inner.as_rule();
            let block = read_block(inner);
            match rule {
                Rule::template => {
                    if sfc.template.is_some() {
                        tracing::warn!("single-file component has more than one <template>; using the last");
                    }
                    sfc.template = Some(block);
                }
                Rule::script if block.has_attr("setup") => sfc.script_setup = Some(block),
                Rule::script => sfc.script = Some(block),
                Rule::style => sfc.styles.push(block),
                _ => {}
            }
        }
    }

    Ok(sfc)
}

/// Attributes from the `*_open` child, content from the `*_body` child.
fn read_block(pair: Pair<Rule>) -> Block {
    let mut block = Block::default();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::template_open | Rule::script_open | Rule::style_open => {
                block.attrs = p
                    .into_inner()
                    .filter(|a| a.as_rule() == Rule::attribute)
                    .map(parse_attr)
                    .collect();
            }
            Rule::template_body | Rule::script_body | Rule::style_body => {
                block.content = p.as_str().to_string();
            }
            _ => {}
        }
    }
    block
}

fn parse_attr(attr: Pair<Rule>) -> Attr {
    let mut parts = attr.into_inner();
    let name = parts.next().map(|p| p.as_str().to_string()).unwrap_or_default();
    let value = parts.next().map(|q| unquote(q.as_str()).to_string());
    Attr { name, value }
}

fn unquote(quoted: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| quoted.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(quoted)
}
