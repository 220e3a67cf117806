use notify_rust::Notification;

use crate::controller::SessionCompleted;

pub fn send_notification(
    event: &SessionCompleted,
    message: &str,
) -> Result<(), notify_rust::error::Error> {
    Notification::new()
        .summary(&format!(
            "{} Pomotask - {} over",
            event.ended.emoji(),
            event.ended.as_str()
        ))
        .body(message)
        .timeout(0) // No auto-dismiss
        .show()?;
    Ok(())
}
