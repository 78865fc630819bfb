use crate::ports::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    Installed,
    Polled,
    Uninstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Poll,
    Uninstall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTransition {
    pub from: FilterStatus,
    pub to: FilterStatus,
    pub reason: &'static str,
}

pub fn filter_transition(
    status: FilterStatus,
    action: FilterAction,
) -> Result<(FilterStatus, FilterTransition), BridgeError> {
    let (to, reason) = match (status, action) {
        (FilterStatus::Installed | FilterStatus::Polled, FilterAction::Poll) => {
            (FilterStatus::Polled, "poll")
        }
        (FilterStatus::Installed | FilterStatus::Polled, FilterAction::Uninstall) => {
            (FilterStatus::Uninstalled, "uninstall")
        }
        (FilterStatus::Uninstalled, _) => {
            return Err(BridgeError::Internal(format!(
                "illegal filter transition: {status:?} -> {action:?}"
            )))
        }
    };
    Ok((
        to,
        FilterTransition {
            from: status,
            to,
            reason,
        },
    ))
}
