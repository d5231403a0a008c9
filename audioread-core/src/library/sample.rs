//! Welcome document seeded into an empty library.

use super::DocumentKind;
use crate::extract::Extracted;

pub const SAMPLE_TITLE: &str = "Welcome to AudioRead";

const SAMPLE_TEXT: &str = "Welcome to AudioRead

AudioRead converts your documents into speech, making it easier to consume written content while on the go or when your eyes need a rest.

Features

AudioRead comes with a variety of features to enhance your reading experience:

1. Text-to-Speech Conversion: Convert any text document to spoken audio.
2. Document Management: Add, remove, and select documents from your library.
3. Playback Controls: Play, pause, and navigate through your audio content.
4. Bookmarking: Save your spot with bookmarks for later listening.
5. Voice Selection: Choose from a variety of voices for your reading experience.
6. Speed Control: Adjust the reading speed to your preference.

Getting Started

To get started, you can:
- Select documents in your library for reading
- Add new documents with the add command
- Remove documents you no longer need

Try clicking on a position in this document to have the reader start from there.

Document Types

AudioRead supports the following document formats:
- PDF files (.pdf)
- Microsoft Word documents (.docx)
- Plain text files (.txt)

Thanks for using AudioRead. We hope it enhances your reading experience!";

/// The sample document's content.
pub fn sample_document() -> (String, Extracted) {
    (
        SAMPLE_TITLE.to_string(),
        Extracted {
            text: SAMPLE_TEXT.to_string(),
            page_count: 1,
            kind: DocumentKind::Txt,
        },
    )
}
