/// Marker for the table-id-to-schema/file registry a real deployment
/// plugs in. Table and field lookup live entirely outside this crate;
/// `Context` only needs a handle to carry one around alongside the
/// buffer pool.
pub trait Catalog: Send + Sync {}
