use katalyst_core::ComponentDescriptor;

pub type SchemaError = Box<dyn std::error::Error + Send + Sync>;

/// A read-only view over one `Table`-capability descriptor, handed to the
/// persistence external interface at P4. The orchestrator does not
/// interpret table metadata itself — it only forwards whichever `Table`
/// descriptors discovery produced, in registry order.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub qualified_name: String,
    pub annotations: Vec<String>,
}

impl TableDescriptor {
    pub(crate) fn from_component(descriptor: &ComponentDescriptor) -> Self {
        Self {
            qualified_name: descriptor.qualified_name().to_string(),
            annotations: descriptor.annotations.clone(),
        }
    }
}

/// External persistence schema materializer. `katalyst` consumes this
/// contract but never implements it — the persistence driver layer itself
/// is out of scope, the same way `katalyst_tx::Adapter` is a contract the
/// core hands commands to rather than a concrete database client.
pub trait SchemaInstaller: Send + Sync {
    fn install(&self, tables: &[TableDescriptor]) -> Result<(), SchemaError>;
}
