pub use self::{
    account::{
        Delegation, GetAccountBalanceResponse, GetAccountDelegationsResponse,
        GetRewardResponse, HeightAccount, UnbondingDelegation, UnbondingEntry,
    },
    amount::{parse_coins, Amount, DEC_PRECISION},
    block::{Block, HeightHash, HeightRange, LatestDataRequest, LatestMark},
    message_log::{find_log, LogAttribute, LogEvent, MessageLog},
    subset_event::{
        Account, AccountDetails, EventTransfer, SubsetEvent, SubsetEventError,
    },
    task::{
        ResponseType, TaskError, TaskRequest, TaskResponse, TaskType,
        END_RESPONSE,
    },
    transaction::{Transaction, TransactionEvent},
};

mod account;
mod amount;
mod block;
mod message_log;
mod subset_event;
mod task;
mod transaction;
