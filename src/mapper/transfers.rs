use crate::{
    error::Error,
    types::{parse_coins, EventTransfer, MessageLog, SubsetEvent},
};

const TRANSFER_EVENT: &str = "transfer";
const RECIPIENT: &str = "recipient";
const AMOUNT: &str = "amount";

/// Collects the settled amounts of every `transfer` event in `log`, grouped
/// by recipient in order of first appearance. Attributes are read in the
/// order they were emitted: each `amount` belongs to the latest `recipient`
/// seen in the same event. Zero amounts and `excluded` recipients are
/// dropped.
pub fn reconcile_transfers(
    log: &MessageLog,
    excluded: &[&str],
) -> Result<Vec<EventTransfer>, Error> {
    let mut transfers: Vec<EventTransfer> = vec![];

    for event in log.events_of(TRANSFER_EVENT) {
        let mut latest_recipient: Option<&str> = None;

        for attribute in &event.attributes {
            match attribute.key.as_str() {
                RECIPIENT => latest_recipient = Some(attribute.value.as_str()),
                AMOUNT => {
                    let recipient = match latest_recipient {
                        Some(recipient) if !excluded.contains(&recipient) => {
                            recipient
                        },
                        _ => continue,
                    };

                    let amounts = parse_coins(&attribute.value)?
                        .into_iter()
                        .filter(|amount| !amount.is_zero())
                        .collect::<Vec<_>>();

                    if amounts.is_empty() {
                        continue;
                    }

                    match transfers
                        .iter_mut()
                        .find(|transfer| transfer.account.id == recipient)
                    {
                        Some(transfer) => transfer.amounts.extend(amounts),
                        None => transfers
                            .push(EventTransfer::new(recipient, amounts)),
                    }
                },
                _ => {},
            }
        }
    }

    Ok(transfers)
}

/// Stores reconciled transfers under `category`; nothing is stored when the
/// log holds no transfers.
pub fn produce_transfers(
    event: &mut SubsetEvent,
    category: &str,
    log: &MessageLog,
    excluded: &[&str],
) -> Result<(), Error> {
    let transfers = reconcile_transfers(log, excluded)?;
    if !transfers.is_empty() {
        event.transfers.insert(category.to_owned(), transfers);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use bigdecimal::num_bigint::BigInt;

    use super::*;
    use crate::mapper::fixtures::{log_with, transfer_event};

    #[test]
    fn amounts_follow_latest_recipient() {
        let log = log_with(vec![transfer_event(&[
            ("recipient", "alice"),
            ("sender", "pool"),
            ("amount", "10uatom"),
            ("recipient", "bob"),
            ("sender", "pool"),
            ("amount", "3uatom,4ustake"),
            ("amount", "5uatom"),
        ])]);

        let transfers = reconcile_transfers(&log, &[]).unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].account.id, "alice");
        assert_eq!(transfers[0].amounts.len(), 1);
        assert_eq!(transfers[1].account.id, "bob");
        assert_eq!(
            transfers[1]
                .amounts
                .iter()
                .map(|amount| amount.text.as_str())
                .collect::<Vec<_>>(),
            ["3uatom", "4ustake", "5uatom"]
        );
    }

    #[test]
    fn merges_recipients_across_events() {
        let log = log_with(vec![
            transfer_event(&[("recipient", "alice"), ("amount", "1uatom")]),
            transfer_event(&[("recipient", "alice"), ("amount", "2uatom")]),
        ]);

        let transfers = reconcile_transfers(&log, &[]).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amounts[1].numeric, BigInt::from(2));
    }

    #[test]
    fn recipient_does_not_leak_between_events() {
        let log = log_with(vec![
            transfer_event(&[("recipient", "alice"), ("amount", "1uatom")]),
            transfer_event(&[("amount", "2uatom")]),
        ]);

        let transfers = reconcile_transfers(&log, &[]).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amounts.len(), 1);
    }

    #[test]
    fn drops_zero_and_excluded() {
        let log = log_with(vec![transfer_event(&[
            ("recipient", "pool"),
            ("amount", "100uatom"),
            ("recipient", "alice"),
            ("amount", "0uatom"),
            ("recipient", "bob"),
            ("amount", "7uatom"),
        ])]);

        let transfers = reconcile_transfers(&log, &["pool"]).unwrap();
        assert_eq!(transfers, vec![EventTransfer::new(
            "bob",
            vec!["7uatom".parse().unwrap()]
        )]);
    }

    #[test]
    fn ignores_other_events_and_is_repeatable() {
        let mut log = log_with(vec![transfer_event(&[
            ("recipient", "alice"),
            ("amount", "1uatom"),
        ])]);
        let mut other = transfer_event(&[("recipient", "x"), ("amount", "9uatom")]);
        other.kind = String::from("coin_received");
        log.events.push(other);

        let first = reconcile_transfers(&log, &[]).unwrap();
        let second = reconcile_transfers(&log, &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn empty_log_produces_nothing() {
        let mut event = SubsetEvent::new("delegate", "staking");
        produce_transfers(&mut event, "reward", &MessageLog::default(), &[])
            .unwrap();
        assert!(event.transfers.is_empty());
    }

    #[test]
    fn malformed_amount_is_reported() {
        let log = log_with(vec![transfer_event(&[
            ("recipient", "alice"),
            ("amount", "1.2.3uatom"),
        ])]);
        assert!(matches!(
            reconcile_transfers(&log, &[]),
            Err(Error::MalformedAmount(_))
        ));
    }
}
