use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::session::Session;

/// Export any serializable data structure to pretty JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<()>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let json_data = serde_json::to_string_pretty(data)?;

    let mut file = std::fs::File::create(output_path)?;
    file.write_all(json_data.as_bytes())?;

    Ok(())
}

/// Save a session as a `.atds` container
pub fn export_session<P: AsRef<Path>>(session: &Session, output_path: P) -> Result<()> {
    let json_data = session.to_atds()?;
    std::fs::write(output_path, json_data)?;
    Ok(())
}
