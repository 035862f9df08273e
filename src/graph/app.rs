//! Application view of a GC graph.
//!
//! The app view lists, for each destination row, the source feeding each
//! destination in index order, plus the row `C` constants. Source rows are
//! implicit: every source of a stable graph is named by some destination
//! (row `U` collects the otherwise unused ones), so the view carries the full
//! graph and converts back losslessly.

use crate::core::{Endpoint, EndpointClass, EndpointRef, EpType, Row};
use crate::error::{GraphIssue, ValidationFailed};
use crate::graph::InternalGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source feeding one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppRef {
    /// Source row.
    pub row: Row,
    /// Source index.
    pub index: u16,
    /// Type carried by the connection.
    pub typ: EpType,
}

/// Row `C` constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constant {
    /// Literal value.
    pub literal: String,
    /// Type of the value.
    pub typ: EpType,
}

/// Application view: destination rows plus constants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppGraph {
    /// Constants by index.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<Constant>,
    /// For each destination row, the feeder of each destination by index.
    pub rows: BTreeMap<Row, Vec<AppRef>>,
}

impl AppGraph {
    /// Builds the view of a graph. Every destination must have a feeder.
    pub fn from_internal(graph: &InternalGraph) -> Result<Self, ValidationFailed> {
        let mut issues = Vec::new();
        let mut rows: BTreeMap<Row, Vec<AppRef>> = BTreeMap::new();
        let mut constants = Vec::new();

        for ep in graph.iter() {
            match (ep.row, ep.class) {
                (Row::C, EndpointClass::Source) => constants.push(Constant {
                    literal: ep.literal.clone().unwrap_or_default(),
                    typ: ep.typ,
                }),
                (_, EndpointClass::Destination) => match ep.feeder() {
                    Some(src) => rows.entry(ep.row).or_default().push(AppRef {
                        row: src.row,
                        index: src.index,
                        typ: ep.typ,
                    }),
                    None => issues.push(GraphIssue::Unconnected(ep.key())),
                },
                _ => {}
            }
        }

        if issues.is_empty() {
            Ok(Self { constants, rows })
        } else {
            Err(ValidationFailed { issues })
        }
    }

    /// Rebuilds the internal graph. Sources are created as destinations name
    /// them; the first naming destination fixes a source's type.
    pub fn to_internal(&self) -> InternalGraph {
        let mut graph = InternalGraph::new();
        for (index, constant) in self.constants.iter().enumerate() {
            graph.insert(Endpoint::constant(index as u16, constant.typ, constant.literal.clone()));
        }
        for (row, refs) in &self.rows {
            for (index, r) in refs.iter().enumerate() {
                let src = EndpointRef::new(r.row, r.index);
                graph.insert(Endpoint::connected(*row, index as u16, r.typ, src));
                let src_key = src.key_from(EndpointClass::Destination);
                if graph.get(&src_key).is_none() {
                    graph.insert(Endpoint::source(r.row, r.index, r.typ));
                }
            }
        }
        graph.complete_references();
        graph
    }

    /// Number of connections in the view.
    pub fn connection_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EndpointKey;

    fn t(raw: u32) -> EpType {
        EpType::new(raw)
    }

    #[test]
    fn view_lists_feeders_by_row() {
        let mut g = InternalGraph::new()
            .with_sources(Row::I, &[t(1), t(2)])
            .with_destinations(Row::O, &[t(2)])
            .connected(EndpointKey::destination(Row::O, 0), EndpointRef::new(Row::I, 1));
        g.collect_unused();
        let app = AppGraph::from_internal(&g).expect("stable graph");
        assert_eq!(app.rows[&Row::O], vec![AppRef { row: Row::I, index: 1, typ: t(2) }]);
        assert_eq!(app.rows[&Row::U], vec![AppRef { row: Row::I, index: 0, typ: t(1) }]);
        assert_eq!(app.connection_count(), 2);
        assert_eq!(app.to_internal(), g);
    }

    #[test]
    fn constants_survive_the_round_trip() {
        let mut g = InternalGraph::new();
        g.insert(Endpoint::constant(0, t(5), "42"));
        g.add_destinations(Row::O, &[t(5)]);
        g.connect(EndpointKey::destination(Row::O, 0), EndpointRef::new(Row::C, 0));
        let app = AppGraph::from_internal(&g).expect("stable graph");
        assert_eq!(app.constants, vec![Constant { literal: "42".into(), typ: t(5) }]);
        assert_eq!(app.to_internal(), g.completed());
    }

    #[test]
    fn unconnected_destinations_have_no_view() {
        let g = InternalGraph::new().with_destinations(Row::O, &[t(1)]);
        let err = AppGraph::from_internal(&g).unwrap_err();
        assert_eq!(err.issues, vec![GraphIssue::Unconnected(EndpointKey::destination(Row::O, 0))]);
    }
}
