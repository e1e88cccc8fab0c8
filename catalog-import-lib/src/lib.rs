//! Catalog Import Library
//!
//! This library imports product rows (with inventory, media and URL keys)
//! into a catalog store through an ordered chain of processing steps.

mod change;
mod config;
mod context;
mod error;
mod importer;
mod media;
mod pipeline;
mod projector;
mod registry;
mod slug;
mod source;
mod store;
mod types;

pub use change::{ChangeDetector, ChangeState};
pub use config::{columns, ImageType, ImportConfig, SlugConfig, DEFAULT_CONFIG};
pub use context::{BatchState, RowContext, RowCounters};
pub use error::{ImportError, ProcessingMessage, ProcessingOutcome, ProcessingState};
pub use importer::{ImportReport, Importer};
pub use media::{MediaRole, MediaRoleResolver, MediaRoles};
pub use pipeline::steps::{
    product_chain, InventoryStep, MediaStep, ProductStep, UrlKeyStep, VisibilityStep,
};
pub use pipeline::{
    BatchReport, ProcessingChain, ProcessingStep, RowFailure, RowOutcome, RowStatus, StepOutcome,
};
pub use projector::AttributeProjector;
pub use registry::ImportRegistry;
pub use slug::{to_url_key, UniqueSlugResolver};
pub use source::{explode, open_rows, CsvRowSource, ExcelRowSource, RowIter};
pub use store::{
    CategoryRepository, Collaborators, MemoryCatalogStore, PersistenceGateway, Reservation,
    SlugRecord, SlugStore, SnapshotRepository, StoreError,
};
pub use types::{
    AttributeMapping, AttributeValue, Category, ColumnType, ColumnTypeTable, EntityId,
    EntitySnapshot, EntityType, NaturalKey, Row, ScalarType, ScopePath, ValueSource,
};
