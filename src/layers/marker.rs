//! Marker layer operations
//!
//! Command sequences the synchronizer issues against the marker layer. None
//! of these open a transaction; callers run them inside one.

use log::debug;

use crate::error::{PanelError, Result};
use crate::host::descriptor::{self, WhiteBalance};
use crate::host::{DocumentId, Host, LayerId, SubmitOptions};
use crate::layers::index::find_by_name;

/// The marker layer in `document`, if present
pub fn find_marker<H: Host + ?Sized>(host: &H, document: DocumentId, name: &str) -> Option<LayerId> {
    find_by_name(&host.layers(document), name).map(|l| l.id)
}

/// Read the marker's persisted white balance.
///
/// A marker without a white balance record reads as neutral.
pub async fn read_white_balance<H: Host + ?Sized>(host: &H, layer: LayerId) -> Result<WhiteBalance> {
    let replies = host
        .submit(&[descriptor::get_layer(layer)], SubmitOptions::silent())
        .await?;
    let reply = replies.first().ok_or_else(|| PanelError::UnexpectedReply {
        reason: format!("no reply to get on {}", layer),
    })?;
    Ok(descriptor::read_white_balance(reply).unwrap_or_default())
}

/// Replace the marker's white balance record
pub async fn write_white_balance<H: Host + ?Sized>(
    host: &H,
    layer: LayerId,
    wb: WhiteBalance,
) -> Result<()> {
    host.submit(
        &[descriptor::set_white_balance(layer, wb)],
        SubmitOptions::silent(),
    )
    .await?;
    Ok(())
}

/// Switch the marker to host-computed white balance
pub async fn apply_auto<H: Host + ?Sized>(host: &H, layer: LayerId) -> Result<()> {
    host.submit(
        &[descriptor::auto_white_balance(layer)],
        SubmitOptions::silent(),
    )
    .await?;
    Ok(())
}

/// Create the marker: stamp the visible image into a new layer, move it to
/// the top of the stack, then name it.
pub async fn create_marker<H: Host + ?Sized>(
    host: &H,
    document: DocumentId,
    name: &str,
) -> Result<LayerId> {
    let replies = host
        .submit(&[descriptor::stamp_visible()], SubmitOptions::silent())
        .await?;
    let layer = replies
        .first()
        .and_then(descriptor::reply_layer_id)
        .or_else(|| host.active_layer(document))
        .ok_or_else(|| PanelError::UnexpectedReply {
            reason: "stamp did not report a new layer".to_string(),
        })?;

    host.submit(
        &[
            descriptor::move_to_top(layer),
            descriptor::rename_layer(layer, name),
        ],
        SubmitOptions::silent(),
    )
    .await?;
    debug!("[MARKER] Created '{}' as {}", name, layer);
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[tokio::test]
    async fn test_create_marker_lands_on_top() {
        let host = MemoryHost::new();
        let doc = host.open_document("photo", &["Retouch", "Background"]);
        // Target a lower layer so the stamp lands mid-stack.
        let background = host.layers(doc)[1].id;
        host.submit(&[descriptor::select_layer(background)], SubmitOptions::silent())
            .await
            .unwrap();

        let marker = create_marker(&host, doc, "White Balance").await.unwrap();

        let layers = host.layers(doc);
        assert_eq!(layers[0].id, marker);
        assert_eq!(layers[0].name, "White Balance");
        assert_eq!(find_marker(&host, doc, "White Balance"), Some(marker));
    }

    #[tokio::test]
    async fn test_read_without_record_is_neutral() {
        let host = MemoryHost::new();
        let doc = host.open_document("photo", &["Background"]);
        let marker = create_marker(&host, doc, "White Balance").await.unwrap();

        let wb = read_white_balance(&host, marker).await.unwrap();
        assert_eq!(wb, WhiteBalance::neutral());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let host = MemoryHost::new();
        let doc = host.open_document("photo", &["Background"]);
        let marker = create_marker(&host, doc, "White Balance").await.unwrap();

        write_white_balance(&host, marker, WhiteBalance::custom(15.0, -10.0))
            .await
            .unwrap();
        let wb = read_white_balance(&host, marker).await.unwrap();
        assert_eq!(wb, WhiteBalance::custom(15.0, -10.0));
    }

    #[tokio::test]
    async fn test_apply_auto_uses_host_result() {
        let host = MemoryHost::new();
        let doc = host.open_document("photo", &["Background"]);
        host.set_auto_result(doc, WhiteBalance::custom(6.0, 2.0)).unwrap();
        let marker = create_marker(&host, doc, "White Balance").await.unwrap();

        apply_auto(&host, marker).await.unwrap();
        let wb = read_white_balance(&host, marker).await.unwrap();
        assert!(wb.is_auto());
        assert_eq!((wb.temperature, wb.tint), (6.0, 2.0));
    }
}
