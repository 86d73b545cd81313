use crate::filter::{Filter, FilterEngine, FilterError};
use crate::graph::{expand, Expansion, ObjectGraph};
use crate::metamodel::MetamodelIndex;
use crate::types::{Edge, ObjectId};
use std::collections::BTreeSet;
use tracing::info;

/// Object selection driven by a filter and an optional neighborhood expansion
#[derive(Debug, Clone, Default)]
pub struct SelectionQuery {
    pub filter_expr: Option<String>,
    pub expand_from: Option<String>,
    /// Negative means unbounded
    pub expand_depth: i64,
    pub expand_classes: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub objects: BTreeSet<ObjectId>,
    pub expansion: Option<Expansion>,
}

impl Selection {
    /// Edges whose two endpoints are both selected, in creation order
    pub fn edges<'g>(&self, graph: &'g ObjectGraph) -> Vec<&'g Edge> {
        graph
            .edges()
            .iter()
            .filter(|e| self.objects.contains(&e.source) && self.objects.contains(&e.target))
            .collect()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl SelectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expr = Some(expression.into());
        self
    }

    pub fn with_expansion(mut self, seed_expression: impl Into<String>, depth: i64) -> Self {
        self.expand_from = Some(seed_expression.into());
        self.expand_depth = depth;
        self
    }

    pub fn with_expand_classes(mut self, classes: BTreeSet<String>) -> Self {
        self.expand_classes = Some(classes);
        self
    }

    /// Compile both expressions, then expand and filter.
    ///
    /// A compile error in either expression aborts before any evaluation.
    pub fn run(&self, graph: &ObjectGraph, metamodel: &MetamodelIndex) -> Result<Selection, FilterError> {
        let filter = self.filter_expr.as_deref().map(Filter::compile).transpose()?;
        let seed_filter = self.expand_from.as_deref().map(Filter::compile).transpose()?;

        let engine = FilterEngine::new(graph, metamodel);

        let expansion = seed_filter.map(|seed_filter| {
            let seeds = engine.select(&seed_filter);
            info!(
                "Expanding from {} seeds matching `{}` (depth {})",
                seeds.len(),
                seed_filter.expression(),
                self.expand_depth
            );
            expand(graph, &seeds, self.expand_depth, self.expand_classes.as_ref())
        });

        let base: Vec<ObjectId> = match &expansion {
            Some(expansion) => expansion.admitted_set().into_iter().collect(),
            None => graph.objects().iter().map(|o| o.index).collect(),
        };

        let objects: BTreeSet<ObjectId> = match &filter {
            Some(filter) => engine.select_from(filter, base).into_iter().collect(),
            None => base.into_iter().collect(),
        };

        info!("Selected {} of {} objects", objects.len(), graph.node_count());

        Ok(Selection { objects, expansion })
    }
}
