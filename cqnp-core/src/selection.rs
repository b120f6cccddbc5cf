//! Winner selection over collected quotes.

use crate::error::{CqnpError, CqnpResult};
use crate::message::{PartyId, Quote};
use crate::money::Currency;

/// Outcome of selecting over one round's quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The winning counterparty and its quote.
    pub winner: (PartyId, Quote),
    /// Valid quoters that did not win, best offer first.
    pub losers: Vec<PartyId>,
    /// Quoters skipped because their currency did not match the round's.
    pub excluded: Vec<PartyId>,
}

/// Pick the highest quote, breaking ties by collection order.
///
/// Comparing amounts is only meaningful within one currency, so quotes in
/// any other currency land in [`Selection::excluded`] instead of being
/// compared.
///
/// Returns [`CqnpError::NoQuotesAvailable`] when nothing comparable remains.
pub fn select_winner(
    currency: Currency,
    quotes: &[(PartyId, Quote)],
) -> CqnpResult<Selection> {
    let mut excluded = Vec::new();
    let mut eligible: Vec<&(PartyId, Quote)> = Vec::new();
    let mut best: Option<usize> = None;

    for entry in quotes {
        let (party, quote) = entry;
        if quote.amount.currency != currency {
            excluded.push(party.clone());
            continue;
        }
        eligible.push(entry);
        let candidate = eligible.len() - 1;
        // Strictly-greater keeps the earliest quote on equal amounts.
        match best {
            Some(current) if eligible[current].1.amount.amount >= quote.amount.amount => {}
            _ => best = Some(candidate),
        }
    }

    let best = best.ok_or(CqnpError::NoQuotesAvailable)?;
    let winner = eligible[best].clone();
    let mut losers: Vec<&(PartyId, Quote)> = eligible
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != best)
        .map(|(_, entry)| *entry)
        .collect();
    // Stable sort keeps collection order for equal amounts.
    losers.sort_by(|left, right| right.1.amount.amount.cmp(&left.1.amount.amount));
    let losers = losers.into_iter().map(|(party, _)| party.clone()).collect();

    Ok(Selection {
        winner,
        losers,
        excluded,
    })
}
