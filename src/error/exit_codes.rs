use crate::error::RolloutError;

pub fn get_exit_code(error: &RolloutError) -> i32 {
    match error {
        RolloutError::InvalidVersionFormat(_)
        | RolloutError::InvalidConfig(_)
        | RolloutError::InvalidDocument(_) => 2,

        RolloutError::VerificationFailed(_) => 3,

        RolloutError::FailoverFetch(_) | RolloutError::HttpStatus(_) | RolloutError::Http(_) => {
            20
        }

        _ => 1,
    }
}
