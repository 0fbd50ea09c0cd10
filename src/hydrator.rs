//! Flat row to aggregate hydration
//!
//! Join queries return one row per child (one per application of a routine,
//! for example). The reducer here folds an ordered row stream back into
//! aggregates by comparing each row's head with the previous one.

/// A row of a one-to-many join: a repeated head plus an optional child.
pub trait RepeatingRow {
    /// The part shared by every row of one aggregate
    type Head: PartialEq;
    /// The part that differs per row; `None` when the aggregate has no children
    type Child;

    /// Split the row into its head and child
    fn split(self) -> (Self::Head, Option<Self::Child>);
}

/// A head with the children collected from its rows
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<H, C> {
    /// The shared head
    pub head: H,
    /// Children in row order
    pub children: Vec<C>,
}

impl<H, C> Aggregate<H, C> {
    fn start(head: H, child: Option<C>) -> Self {
        Self {
            head,
            children: child.into_iter().collect(),
        }
    }
}

/// Rebuild aggregates from rows ordered so that each aggregate is contiguous.
///
/// A row extends the current aggregate when its head equals the previous
/// head and it carries a child. Anything else starts a new aggregate.
pub fn hydrate<R, I>(rows: I) -> Vec<Aggregate<R::Head, R::Child>>
where
    R: RepeatingRow,
    I: IntoIterator<Item = R>,
{
    let mut aggregates: Vec<Aggregate<R::Head, R::Child>> = Vec::new();
    for row in rows {
        let (head, child) = row.split();
        match (aggregates.last_mut(), child) {
            (Some(current), Some(child)) if current.head == head => current.children.push(child),
            (_, child) => aggregates.push(Aggregate::start(head, child)),
        }
    }
    aggregates
}

/// Rebuild only the first aggregate, stopping at the next boundary.
pub fn hydrate_first<R, I>(rows: I) -> Option<Aggregate<R::Head, R::Child>>
where
    R: RepeatingRow,
    I: IntoIterator<Item = R>,
{
    let mut rows = rows.into_iter();
    let (head, child) = rows.next()?.split();
    let mut first = Aggregate::start(head, child);
    for row in rows {
        let (head, child) = row.split();
        match child {
            Some(child) if head == first.head => first.children.push(child),
            _ => break,
        }
    }
    Some(first)
}

/// Fallible variant of [`hydrate_first`] for row streams read straight from
/// a statement. Rows past the first boundary are never fetched.
pub fn try_hydrate_first<R, E, I>(rows: I) -> Result<Option<Aggregate<R::Head, R::Child>>, E>
where
    R: RepeatingRow,
    I: IntoIterator<Item = Result<R, E>>,
{
    let mut rows = rows.into_iter();
    let Some(row) = rows.next() else {
        return Ok(None);
    };
    let (head, child) = row?.split();
    let mut first = Aggregate::start(head, child);
    for row in rows {
        let (head, child) = row?.split();
        match child {
            Some(child) if head == first.head => first.children.push(child),
            _ => break,
        }
    }
    Ok(Some(first))
}
