//! Static analyses over the observer graph.
//!
//! All analyses walk the same graph: from a value to every node observing
//! it, and from a node to every value it drives. They run on a model that
//! has been built but need not be initialized, and they never touch signal
//! state.
//!
//! - [`cycles`]: feedback loop detection by layer peeling
//! - [`dependency`]: which inputs can affect an output
//! - [`path_len`]: longest chain of delay nodes from an input
//!
//! A listener registered on a value is an opaque sink. Reaching one during a
//! walk fails the analysis with [`Error::Backtrack`].

pub mod cycles;
pub mod dependency;
pub mod path_len;


pub use cycles::{check_for_cycles, has_circles, layers};
pub use dependency::DependencyAnalyser;
pub use path_len::PathLenAnalyser;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::node::Node;
use crate::types::{NodeId, Observer, ValueId};

/// Default depth bound of the dependency walk.
pub const MAX_TRAVERSAL_DEPTH: usize = 1000;

/// Call `visit` for every node observing `value`, in registration order.
pub(crate) fn for_each_successor<F>(model: &Model, value: ValueId, mut visit: F) -> Result<()>
where
    F: FnMut(NodeId, &dyn Node) -> Result<()>,
{
    for &observer in model.cell(value)?.observers() {
        match observer {
            Observer::Node(id) => visit(id, model.node(id)?)?,
            Observer::Listener(_) => return Err(Error::Backtrack { value, observer }),
        }
    }
    Ok(())
}
