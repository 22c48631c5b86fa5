/*!
 * Monitoring
 * Tracing initialisation
 */

mod tracer;

pub use tracer::init_tracing;
