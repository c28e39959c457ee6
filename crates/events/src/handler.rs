/// Execute an aggregate command deterministically (no IO).
///
/// Decides events with `handle`, then evolves the aggregate with `apply`.
/// Persistence is the dispatcher's job; this is the in-memory lifecycle used by
/// domain tests and replay tooling.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: stockroom_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
