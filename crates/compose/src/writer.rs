//! PDF writing service over lopdf.
//!
//! Builds the output document: source pages copied in export order into a
//! fresh page tree, plus the font, image and content-stream plumbing the
//! compositor draws through. The source bytes are never mutated.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pdf_annotator_model::{ImageData, ImageFormat};

use crate::error::ExportError;

/// Resource name under which the built-in text font is registered.
const FONT_NAME: &str = "Fa";

/// Output document under construction.
pub struct DocumentWriter {
    doc: Document,
    page_ids: Vec<ObjectId>,
    helvetica: Option<ObjectId>,
    image_count: usize,
}

impl DocumentWriter {
    /// Open the source document and copy its pages into a new output
    /// document, in `order`'s sequence.
    ///
    /// Output page `i` is the source page numbered `order[i]` (1-based).
    /// Inheritable page attributes (MediaBox, Resources) are materialized
    /// onto each copied page, since the source page tree is not carried
    /// over.
    pub fn from_source(source_bytes: &[u8], order: &[u32]) -> Result<Self, ExportError> {
        let source = Document::load_mem(source_bytes).map_err(ExportError::Load)?;
        let source_pages = source.get_pages();

        let mut doc = Document::with_version("1.5");
        let mut catalog_id = None;
        let mut pages_id = None;

        // Carry every object except the page tree itself; pages are copied
        // below in export order, Catalog and Pages are rebuilt.
        for (&object_id, object) in &source.objects {
            match dict_type(object) {
                Some(b"Catalog") => catalog_id = Some(object_id),
                Some(b"Pages") => {
                    pages_id.get_or_insert(object_id);
                }
                Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
                _ => {
                    doc.objects.insert(object_id, object.clone());
                }
            }
        }

        let pages_id =
            pages_id.ok_or_else(|| ExportError::Structure("no Pages root".to_owned()))?;
        let catalog_id =
            catalog_id.ok_or_else(|| ExportError::Structure("no Catalog".to_owned()))?;

        let mut page_ids = Vec::with_capacity(order.len());
        for &page_number in order {
            let &source_page_id =
                source_pages.get(&page_number).ok_or(ExportError::MissingPage(page_number))?;

            let mut dict = source.get_dictionary(source_page_id)?.clone();
            for key in [b"MediaBox".as_slice(), b"Resources".as_slice()] {
                if dict.get(key).is_err() {
                    if let Some(value) = inherited_attribute(&source, source_page_id, key) {
                        dict.set(key, value);
                    }
                }
            }
            dict.set("Parent", pages_id);

            doc.objects.insert(source_page_id, Object::Dictionary(dict));
            page_ids.push(source_page_id);
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => page_ids.len() as i64,
                "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            }),
        );
        doc.objects.insert(
            catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            }),
        );
        doc.trailer.set("Root", catalog_id);
        doc.max_id = source.max_id;

        Ok(Self { doc, page_ids, helvetica: None, image_count: 0 })
    }

    /// Number of pages in the output document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Height of an output page in points, from its MediaBox.
    pub fn page_height(&self, page_index: usize) -> Result<f32, ExportError> {
        let page_id = self.page_id(page_index)?;
        let dict = self.doc.get_dictionary(page_id)?;
        let raw = dict
            .get(b"MediaBox")
            .map_err(|_| ExportError::Structure(format!("page {page_index} has no MediaBox")))?;
        let resolved = match raw {
            Object::Reference(reference) => self.doc.get_object(*reference)?,
            other => other,
        };
        let array = resolved.as_array()?;
        if array.len() != 4 {
            return Err(ExportError::Structure(format!("page {page_index} MediaBox malformed")));
        }
        Ok((array[3].as_float()? - array[1].as_float()?).abs())
    }

    /// Draw black text with the built-in Helvetica at a page-space position.
    pub fn draw_text(
        &mut self,
        page_index: usize,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
    ) -> Result<(), ExportError> {
        let page_id = self.page_id(page_index)?;
        let font_id = self.embed_helvetica();
        self.add_page_resource(page_id, "Font", FONT_NAME, font_id)?;

        let ops = format!(
            "q 0 0 0 rg BT /{FONT_NAME} {font_size} Tf {x} {y} Td ({}) Tj ET Q",
            escape_pdf_string(text)
        );
        self.append_content(page_id, ops)
    }

    /// Embed an image payload as an XObject, returning its object id.
    ///
    /// JPEG payloads pass through as DCTDecode streams; PNG payloads are
    /// decoded and embedded as raw RGB with a grayscale SMask for alpha.
    pub fn embed_image(&mut self, image: &ImageData) -> Result<ObjectId, ExportError> {
        match image.format {
            ImageFormat::Jpeg => {
                let decoded = image::load_from_memory(&image.bytes)
                    .map_err(|_| ExportError::UnsupportedImage)?;
                let color_space =
                    if decoded.color().has_color() { "DeviceRGB" } else { "DeviceGray" };

                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => image.natural_width as i64,
                        "Height" => image.natural_height as i64,
                        "ColorSpace" => color_space,
                        "BitsPerComponent" => 8,
                        "Filter" => "DCTDecode",
                    },
                    image.bytes.clone(),
                )
                .with_compression(false);

                Ok(self.doc.add_object(stream))
            }
            ImageFormat::Png => {
                let decoded = image::load_from_memory(&image.bytes)
                    .map_err(|_| ExportError::UnsupportedImage)?
                    .to_rgba8();
                let (width, height) = decoded.dimensions();

                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in decoded.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }

                let smask_id = self.doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    alpha,
                ));

                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                        "SMask" => smask_id,
                    },
                    rgb,
                );

                Ok(self.doc.add_object(stream))
            }
        }
    }

    /// Draw an embedded image at a page-space position and size.
    pub fn draw_image(
        &mut self,
        page_index: usize,
        image_id: ObjectId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), ExportError> {
        let page_id = self.page_id(page_index)?;

        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.add_page_resource(page_id, "XObject", &name, image_id)?;

        let ops = format!("q {width} 0 0 {height} {x} {y} cm /{name} Do Q");
        self.append_content(page_id, ops)
    }

    /// Serialize the output document.
    pub fn save(mut self) -> Result<Vec<u8>, ExportError> {
        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn page_id(&self, page_index: usize) -> Result<ObjectId, ExportError> {
        self.page_ids
            .get(page_index)
            .copied()
            .ok_or_else(|| ExportError::Structure(format!("output has no page {page_index}")))
    }

    fn embed_helvetica(&mut self) -> ObjectId {
        if let Some(id) = self.helvetica {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        self.helvetica = Some(id);
        id
    }

    /// Register `target` under `Resources/<category>/<name>` on a page.
    ///
    /// Resources shared by reference are inlined onto the page first, so
    /// the registration never leaks into other pages.
    fn add_page_resource(
        &mut self,
        page_id: ObjectId,
        category: &str,
        name: &str,
        target: ObjectId,
    ) -> Result<(), ExportError> {
        let detached = {
            let page = self.doc.get_object_mut(page_id).and_then(|obj| obj.as_dict_mut())?;
            page.remove(b"Resources")
        };
        let mut resources = match detached {
            Some(Object::Dictionary(dict)) => dict,
            Some(Object::Reference(reference)) => self.doc.get_dictionary(reference)?.clone(),
            None => Dictionary::new(),
            Some(_) => {
                return Err(ExportError::Structure("page Resources is not a dictionary".to_owned()))
            }
        };

        let mut category_dict = match resources.remove(category.as_bytes()) {
            Some(Object::Dictionary(dict)) => dict,
            Some(Object::Reference(reference)) => self.doc.get_dictionary(reference)?.clone(),
            _ => Dictionary::new(),
        };
        category_dict.set(name, target);
        resources.set(category, category_dict);

        let page = self.doc.get_object_mut(page_id).and_then(|obj| obj.as_dict_mut())?;
        page.set("Resources", resources);
        Ok(())
    }

    /// Append a content stream after the page's existing content.
    fn append_content(&mut self, page_id: ObjectId, ops: String) -> Result<(), ExportError> {
        let stream_id =
            self.doc.add_object(Object::Stream(Stream::new(Dictionary::new(), ops.into_bytes())));

        let page = self.doc.get_object_mut(page_id).and_then(|obj| obj.as_dict_mut())?;
        match page.get(b"Contents").ok().cloned() {
            Some(Object::Reference(existing)) => {
                page.set(
                    "Contents",
                    vec![Object::Reference(existing), Object::Reference(stream_id)],
                );
            }
            Some(Object::Array(mut streams)) => {
                streams.push(Object::Reference(stream_id));
                page.set("Contents", streams);
            }
            _ => page.set("Contents", stream_id),
        }
        Ok(())
    }
}

fn dict_type(object: &Object) -> Option<&[u8]> {
    object.as_dict().ok()?.get(b"Type").ok()?.as_name().ok()
}

/// Look up an inheritable page attribute, walking the source Parent chain.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    for _ in 0..16 {
        let dict = doc.get_object(current?).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").ok().and_then(|parent| parent.as_reference().ok());
    }
    None
}

/// Escape the characters with meaning inside PDF literal strings.
fn escape_pdf_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}
