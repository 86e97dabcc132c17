//! Registering a pulled image under a tag

use crate::{
    api::{Image, ImageStream, ImageStreamMapping, ObjectMeta},
    client::{ControlPlane, RequestContext},
    errors::{ApiError, ErrorCode, ImageStreamError},
    imagestream::ScopedImageStream,
};

impl ScopedImageStream {
    /// Tag `image` into the stream, creating the stream if it doesn't exist
    ///
    /// Mapping writes use the registry's own client. A missing stream is
    /// provisioned with `user_client`, so the requesting user's permissions
    /// and quota apply to it. After provisioning the mapping is attempted
    /// exactly once more; whatever that attempt returns is final.
    pub async fn create_mapping(
        &mut self,
        ctx: &RequestContext,
        user_client: &dyn ControlPlane,
        tag: &str,
        image: &Image,
    ) -> Result<(), ImageStreamError> {
        let mapping = ImageStreamMapping {
            metadata: ObjectMeta {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
                ..Default::default()
            },
            image: image.clone(),
            tag: tag.to_owned(),
        };

        let err = match ctx
            .call(self.client.create_image_stream_mapping(&mapping))
            .await
        {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if err.is_quota_exceeded() {
            return Err(self.mapping_error(
                ErrorCode::Forbidden,
                "quota exceeded during creation of",
                err,
            ));
        }

        if err.is_not_found()
            && err
                .details_kind()
                .map(|kind| kind.eq_ignore_ascii_case("namespaces"))
                .unwrap_or(false)
        {
            return Err(self.mapping_error(ErrorCode::Forbidden, "error creating", err));
        }

        if !self.is_missing_stream(&err) {
            return Err(self.mapping_error(ErrorCode::Unknown, "error creating", err));
        }

        let created = self.provision(ctx, user_client).await?;
        log::debug!("cache image stream {}", self.reference());
        self.getter.cache_image_stream(created);

        match ctx
            .call(self.client.create_image_stream_mapping(&mapping))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_quota_exceeded() => Err(self.mapping_error(
                ErrorCode::Forbidden,
                "quota exceeded during second creation of",
                err,
            )),
            Err(err) => Err(self.mapping_error(ErrorCode::Unknown, "error during second creation of", err)),
        }
    }

    /// Is this the failure the control plane reports for a mapping into a
    /// stream that doesn't exist yet?
    fn is_missing_stream(&self, err: &ApiError) -> bool {
        err.status == http::StatusCode::NOT_FOUND
            && err.details_kind() == Some("imagestreammappings")
            && err.details_name() == Some(self.name.as_str())
    }

    /// Auto-provision an empty stream
    ///
    /// Losing a creation race to another writer counts as success.
    async fn provision(
        &self,
        ctx: &RequestContext,
        user_client: &dyn ControlPlane,
    ) -> Result<ImageStream, ImageStreamError> {
        let stream = ImageStream::named(&self.namespace, &self.name);
        log::debug!("auto provisioning image stream {}", self.reference());

        match ctx.call(user_client.create_image_stream(&stream)).await {
            Ok(created) => Ok(created),
            Err(err) if err.is_already_exists() || err.is_conflict() => {
                log::debug!(
                    "image stream {} already provisioned: {}",
                    self.reference(),
                    err
                );
                Ok(stream)
            }
            Err(err) if err.is_forbidden() || err.is_unauthorized() || err.is_quota_exceeded() => {
                Err(ImageStreamError::new(
                    ErrorCode::Forbidden,
                    format!(
                        "create_mapping: denied creating image stream {}",
                        self.reference()
                    ),
                )
                .caused_by(err))
            }
            Err(err) => Err(ImageStreamError::new(
                ErrorCode::Unknown,
                format!(
                    "create_mapping: error auto provisioning image stream {}",
                    self.reference()
                ),
            )
            .caused_by(err)),
        }
    }

    fn mapping_error(&self, code: ErrorCode, what: &str, err: ApiError) -> ImageStreamError {
        ImageStreamError::new(
            code,
            format!(
                "create_mapping: {} {} image stream mapping",
                what,
                self.reference()
            ),
        )
        .caused_by(err)
    }
}
