use anyhow::{Context, Result};
use sqlx::PgPool;
use std::env;
use std::fs;

/// Create the admin account if it is missing, otherwise replace its
/// password hash.
pub async fn reset_password(pool: &PgPool, username: &str, new_pass: &str) -> Result<()> {
    let hash = bcrypt::hash(new_pass, bcrypt::DEFAULT_COST).context("Failed to hash password")?;

    sqlx::query(
        r#"
        INSERT INTO admins (username, password_hash)
        VALUES ($1, $2)
        ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
        "#,
    )
    .bind(username)
    .bind(&hash)
    .execute(pool)
    .await
    .context("Failed to store admin password")?;

    println!("Password for admin '{}' has been set.", username);
    Ok(())
}

pub fn install_service() -> Result<()> {
    if unsafe { libc::getuid() } != 0 {
        return Err(anyhow::anyhow!(
            "This command must be run as root (sudo) to install the systemd service."
        ));
    }

    let exe_path = env::current_exe()?;
    let working_dir = env::current_dir()?;

    let service_content = format!(
        r#"[Unit]
Description=Relaydir node registry
After=network.target postgresql.service

[Service]
Type=simple
User=root
WorkingDirectory={}
ExecStart={} serve
Restart=always
EnvironmentFile={}/.env

[Install]
WantedBy=multi-user.target
"#,
        working_dir.display(),
        exe_path.display(),
        working_dir.display()
    );

    let service_path = "/etc/systemd/system/relaydir-server.service";
    fs::write(service_path, service_content)
        .with_context(|| format!("Failed to write service file to {}", service_path))?;

    println!("Systemd service created at {}", service_path);
    println!("Enable and start it with:");
    println!("  systemctl daemon-reload");
    println!("  systemctl enable --now relaydir-server");

    Ok(())
}
