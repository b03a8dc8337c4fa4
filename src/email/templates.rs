pub fn password_reset_text(reset_url: &str) -> String {
    format!(
        "Someone asked to reset the password of your SkillTrack account.\n\n\
         Choose a new password here:\n{reset_url}\n\n\
         The link works once and expires soon. If you did not ask for it, \
         ignore this email and your password stays the same.\n"
    )
}

pub fn password_reset_html(reset_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Reset your password</h2>
    <p>Someone asked to reset the password of your SkillTrack account.</p>
    <p><a href="{reset_url}" style="display: inline-block; padding: 10px 20px; background: #2563eb; color: white; text-decoration: none; border-radius: 4px;">Choose a new password</a></p>
    <p style="color: #666; font-size: 14px;">The link works once and expires soon. If you did not ask for it, ignore this email and your password stays the same.</p>
</body>
</html>"#
    )
}
