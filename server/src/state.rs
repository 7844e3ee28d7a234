use crate::cloudinary::CloudinaryClient;

// The relay keeps no record of books: each request owns its own temp
// files, so the only shared piece is the media host client.
#[derive(Clone)]
pub struct AppState {
    pub media: CloudinaryClient,
}

impl AppState {
    pub fn new(media: CloudinaryClient) -> Self {
        Self { media }
    }
}
