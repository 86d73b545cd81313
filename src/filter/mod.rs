//! Sandboxed filter expressions over model objects.
//!
//! A filter is compiled once into a closed tree and evaluated per object
//! against a context of built-in names and class attributes.

pub mod ast;
pub mod context;
mod errors;
mod eval;
mod lexer;
mod parser;
mod tokens;

pub use ast::{BoolOp, Call, CmpOp, Expr, Literal};
pub use context::{Bindings, ClassBinding, ObjectContext, Operand, BUILTIN_NAMES};
pub use errors::{CompileError, FilterError};

use crate::graph::ObjectGraph;
use crate::metamodel::MetamodelIndex;
use crate::types::ObjectId;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A compiled filter expression
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    expression: String,
    expr: Expr,
    names: BTreeSet<String>,
}

impl Filter {
    pub fn compile(expression: &str) -> Result<Self, FilterError> {
        let expr = parser::parse_expression(expression).map_err(|errors| FilterError {
            expression: expression.to_string(),
            errors,
        })?;
        let names = expr.referenced_names().into_iter().map(str::to_string).collect();
        debug!("Compiled filter `{}`", expression);

        Ok(Self {
            expression: expression.to_string(),
            expr,
            names,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Variable names the expression reads
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn references(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Evaluates compiled filters against the objects of one graph
pub struct FilterEngine<'g> {
    graph: &'g ObjectGraph,
    bindings: Bindings,
}

impl<'g> FilterEngine<'g> {
    pub fn new(graph: &'g ObjectGraph, metamodel: &MetamodelIndex) -> Self {
        let bindings = Bindings::new(graph, metamodel);
        debug!("Filter bindings built for {} classes", bindings.len());
        Self { graph, bindings }
    }

    pub fn matches(&self, filter: &Filter, id: ObjectId) -> bool {
        let object = self.graph.object(id);
        let ctx = ObjectContext {
            graph: self.graph,
            object,
            binding: self.bindings.class(&object.eclass),
        };
        eval::evaluate(&filter.expr, &ctx)
    }

    /// Names the filter reads that are neither built-in nor declared by any
    /// class present in the graph
    pub fn unknown_names<'f>(&self, filter: &'f Filter) -> Vec<&'f str> {
        filter
            .names()
            .iter()
            .map(String::as_str)
            .filter(|name| !BUILTIN_NAMES.contains(name) && !self.bindings.declares(name))
            .collect()
    }

    /// Ids of every object the filter accepts, in preorder
    pub fn select(&self, filter: &Filter) -> Vec<ObjectId> {
        self.select_from(filter, self.graph.objects().iter().map(|o| o.index))
    }

    /// Narrow a candidate set, keeping its order
    pub fn select_from<I>(&self, filter: &Filter, candidates: I) -> Vec<ObjectId>
    where
        I: IntoIterator<Item = ObjectId>,
    {
        for name in self.unknown_names(filter) {
            warn!(
                "Filter `{}` reads `{}`, which no class in the graph declares; it is absent on every object",
                filter.expression(),
                name
            );
        }
        let selected: Vec<ObjectId> = candidates
            .into_iter()
            .filter(|id| self.matches(filter, *id))
            .collect();
        debug!("Filter `{}` selected {} objects", filter.expression(), selected.len());
        selected
    }
}
