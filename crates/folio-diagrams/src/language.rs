//! Supported diagram languages.
//!
//! Mermaid is the primary language; the rest of the Kroki family is accepted
//! as well since the same service renders them.

/// Supported diagram languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramLanguage {
    Mermaid,
    PlantUml,
    C4PlantUml,
    GraphViz,
    Ditaa,
    BlockDiag,
    SeqDiag,
    ActDiag,
    NwDiag,
    Erd,
    Nomnoml,
    Svgbob,
    Vega,
    VegaLite,
    WaveDrom,
}

impl DiagramLanguage {
    /// Parse language from a code fence language tag.
    ///
    /// Accepts both `mermaid` and the `kroki-mermaid` form used by the `MkDocs`
    /// Kroki plugin. Returns `None` for non-diagram languages.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lang = s.strip_prefix("kroki-").unwrap_or(s);

        match lang {
            "mermaid" => Some(Self::Mermaid),
            "plantuml" => Some(Self::PlantUml),
            "c4plantuml" => Some(Self::C4PlantUml),
            "graphviz" | "dot" => Some(Self::GraphViz),
            "ditaa" => Some(Self::Ditaa),
            "blockdiag" => Some(Self::BlockDiag),
            "seqdiag" => Some(Self::SeqDiag),
            "actdiag" => Some(Self::ActDiag),
            "nwdiag" => Some(Self::NwDiag),
            "erd" => Some(Self::Erd),
            "nomnoml" => Some(Self::Nomnoml),
            "svgbob" => Some(Self::Svgbob),
            "vega" => Some(Self::Vega),
            "vegalite" => Some(Self::VegaLite),
            "wavedrom" => Some(Self::WaveDrom),
            _ => None,
        }
    }

    /// Kroki endpoint name, also used as the canonical language name.
    #[must_use]
    pub fn kroki_endpoint(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
            Self::C4PlantUml => "c4plantuml",
            Self::GraphViz => "graphviz",
            Self::Ditaa => "ditaa",
            Self::BlockDiag => "blockdiag",
            Self::SeqDiag => "seqdiag",
            Self::ActDiag => "actdiag",
            Self::NwDiag => "nwdiag",
            Self::Erd => "erd",
            Self::Nomnoml => "nomnoml",
            Self::Svgbob => "svgbob",
            Self::Vega => "vega",
            Self::VegaLite => "vegalite",
            Self::WaveDrom => "wavedrom",
        }
    }
}
