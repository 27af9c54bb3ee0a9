use atat::atat_derive::AtatResp;

/// Responses are matched by their terminal needles, so commands are never parsing any response
#[derive(Clone, AtatResp)]
pub struct NoResponse;
