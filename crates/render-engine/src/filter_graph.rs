//! Filter graphs as data.
//!
//! A [`FilterGraph`] is a list of [`FilterNode`]s. Each node reads named or
//! input pads, runs a chain of [`Filter`]s, and writes named pads. The graph
//! is only turned into the transcoder's string syntax at the process
//! boundary (via `Display`).

use std::fmt;

/// Format seconds for filter arguments and seek options.
pub fn secs(value: f64) -> String {
    format!("{value:.6}")
}

/// Stream type selector on an input pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// A pad a node reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadRef {
    /// A stream of a numbered process input, e.g. `[2:a]`.
    Input { index: usize, stream: StreamKind },
    /// A pad produced by another node, e.g. `[aud0s1]`.
    Label(String),
}

impl PadRef {
    pub fn video(index: usize) -> Self {
        Self::Input {
            index,
            stream: StreamKind::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        Self::Input {
            index,
            stream: StreamKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { index, stream } => {
                let s = match stream {
                    StreamKind::Video => "v",
                    StreamKind::Audio => "a",
                };
                write!(f, "[{index}:{s}]")
            }
            Self::Label(name) => write!(f, "[{name}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterArg {
    Positional(String),
    Keyed(String, String),
}

/// A single filter with its arguments, e.g. `atrim=start=1.0:end=2.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    /// Append a `key=value` argument.
    pub fn kv(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args
            .push(FilterArg::Keyed(key.into(), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            match arg {
                FilterArg::Positional(v) => f.write_str(v)?,
                FilterArg::Keyed(k, v) => write!(f, "{k}={v}")?,
            }
        }
        Ok(())
    }
}

/// Filters applied in sequence, joined with `,`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain(Vec<Filter>);

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, filter: Filter) -> Self {
        self.0.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

/// One `;`-separated statement: input pads, a filter chain, output pads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterNode {
    inputs: Vec<PadRef>,
    chain: FilterChain,
    outputs: Vec<String>,
}

impl FilterNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, pad: PadRef) -> Self {
        self.inputs.push(pad);
        self
    }

    pub fn inputs(mut self, pads: impl IntoIterator<Item = PadRef>) -> Self {
        self.inputs.extend(pads);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.chain.push(filter);
        self
    }

    pub fn output(mut self, label: impl Into<String>) -> Self {
        self.outputs.push(label.into());
        self
    }

    pub fn input_pads(&self) -> &[PadRef] {
        &self.inputs
    }

    pub fn output_labels(&self) -> &[String] {
        &self.outputs
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{pad}")?;
        }
        write!(f, "{}", self.chain)?;
        for label in &self.outputs {
            write!(f, "[{label}]")?;
        }
        Ok(())
    }
}

/// A complete `-filter_complex` graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: FilterNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find the node producing `label`.
    pub fn producer_of(&self, label: &str) -> Option<&FilterNode> {
        self.nodes
            .iter()
            .find(|n| n.outputs.iter().any(|o| o == label))
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_display() {
        assert_eq!(Filter::new("anull").to_string(), "anull");
        assert_eq!(
            Filter::new("fade").arg("in").kv("st", 0).kv("d", 1).to_string(),
            "fade=in:st=0:d=1"
        );
        assert_eq!(
            Filter::new("setpts").arg("PTS-STARTPTS").to_string(),
            "setpts=PTS-STARTPTS"
        );
    }

    #[test]
    fn test_graph_display_joins_nodes() {
        let mut graph = FilterGraph::new();
        graph.push(
            FilterNode::new()
                .input(PadRef::audio(2))
                .filter(Filter::new("asplit").arg(3))
                .output("s1")
                .output("s2")
                .output("s3"),
        );
        graph.push(
            FilterNode::new()
                .input(PadRef::label("s1"))
                .filter(Filter::new("atrim").kv("start", secs(1.5)).kv("end", secs(2.0)))
                .filter(Filter::new("asetpts").arg("PTS-STARTPTS"))
                .output("fi"),
        );

        assert_eq!(
            graph.to_string(),
            "[2:a]asplit=3[s1][s2][s3];[s1]atrim=start=1.500000:end=2.000000,asetpts=PTS-STARTPTS[fi]"
        );
        assert!(graph.producer_of("s2").is_some());
        assert!(graph.producer_of("fo").is_none());
    }

    #[test]
    fn test_video_pad_display() {
        assert_eq!(PadRef::video(0).to_string(), "[0:v]");
    }
}
