// camera.rs

use crate::*;

/// The camera as the node sees it. A frame borrows the driver's buffer and
/// gives it back when dropped.
pub trait FrameSource {
    type Frame<'a>: AsRef<[u8]>
    where
        Self: 'a;

    fn capture(&mut self) -> Option<Self::Frame<'_>>;
}

/// Uploads JPEG frames, multipart or raw. Only a 2xx counts as success.
pub struct ImageUploader<'a, C> {
    transport: &'a Transport<C>,
    config: &'a NodeConfig,
    boundaries: &'a mut BoundaryGen,
}

impl<'a, C: Connector> ImageUploader<'a, C> {
    pub fn new(
        transport: &'a Transport<C>,
        config: &'a NodeConfig,
        boundaries: &'a mut BoundaryGen,
    ) -> Self {
        Self {
            transport,
            config,
            boundaries,
        }
    }

    pub fn request(&mut self, image: &[u8]) -> anyhow::Result<UploadRequest> {
        let req = match self.config.image_upload {
            ImageUpload::Multipart => {
                let boundary = self.boundaries.next(image);
                let payload = MultipartPayload::new(&boundary, &self.config.image_name, image)?;
                let content_type = payload.content_type().to_string();
                let len = payload.content_length();
                let body = payload.into_body();
                if body.len() != len {
                    bail!("multipart body is {} bytes, announced {len}", body.len());
                }
                UploadRequest::post(&self.config.image_path).body(content_type, body)
            }
            ImageUpload::Raw => {
                UploadRequest::post(&self.config.raw_image_path).body("image/jpeg", image.to_vec())
            }
        };
        Ok(req)
    }

    pub async fn upload(&mut self, image: &[u8]) -> bool {
        let request = match self.request(image) {
            Ok(r) => r,
            Err(e) => {
                error!("Image framing failed: {e}");
                return false;
            }
        };
        info!(
            "Uploading {} byte frame ({} byte body)",
            image.len(),
            request.body_bytes().len()
        );

        match self.transport.perform_exchange(request).await {
            Ok(res) if res.is_success() => {
                info!("Upload OK ({:?}): {}", res.status(), res.body_text());
                true
            }
            Ok(res) => {
                error!(
                    "Upload rejected, status {:?}: {}",
                    res.status(),
                    res.body_text()
                );
                false
            }
            Err(e) => {
                error!("Upload failed: {e}");
                false
            }
        }
    }
}


// EOF
