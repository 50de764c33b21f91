//! KML interchange document writer.
//!
//! Produces the placemark document embedded in the report package for
//! third-party GIS tools. One placemark per pole; the description embeds
//! relative references to the images packaged alongside the document.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use osprey_core::error::{OspreyError, Result};
use osprey_core::models::{PoleSurvey, SiteSurvey};

use crate::sanitize::sanitize;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Relative path, inside the report package, of the nth image of a pole.
pub fn image_entry_name(pole: &PoleSurvey, index: usize) -> String {
    format!("images/{}_IMG_{}.jpg", sanitize(&pole.name), index + 1)
}

/// Render the full placemark document for a survey.
pub fn render_document(site: &SiteSurvey) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(archive_err)?;

    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NAMESPACE));
    writer.write_event(Event::Start(kml)).map_err(archive_err)?;
    writer.write_event(Event::Start(BytesStart::new("Document"))).map_err(archive_err)?;

    writer.write_event(Event::Start(BytesStart::new("name"))).map_err(archive_err)?;
    writer.write_event(Event::Text(BytesText::new(&site.site_name))).map_err(archive_err)?;
    writer.write_event(Event::End(BytesEnd::new("name"))).map_err(archive_err)?;

    for pole in &site.poles {
        write_placemark(&mut writer, pole)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Document"))).map_err(archive_err)?;
    writer.write_event(Event::End(BytesEnd::new("kml"))).map_err(archive_err)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| OspreyError::Archive { reason: e.to_string() })
}

fn archive_err<E: std::fmt::Display>(e: E) -> OspreyError {
    OspreyError::Archive { reason: e.to_string() }
}

fn write_placemark(writer: &mut Writer<Vec<u8>>, pole: &PoleSurvey) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Placemark"))).map_err(archive_err)?;

    writer.write_event(Event::Start(BytesStart::new("name"))).map_err(archive_err)?;
    writer.write_event(Event::Text(BytesText::new(&pole.name))).map_err(archive_err)?;
    writer.write_event(Event::End(BytesEnd::new("name"))).map_err(archive_err)?;

    // Viewers render the description as HTML, so the image references and
    // notes go through a CDATA block rather than escaped text.
    let mut description = String::new();
    for index in 0..pole.photos.len() {
        description.push_str(&format!(
            "<img src=\"{}\" width=\"400\"/><br/>",
            image_entry_name(pole, index)
        ));
    }
    description.push_str(&format!("<p>{}</p>", pole.notes));

    writer.write_event(Event::Start(BytesStart::new("description"))).map_err(archive_err)?;
    writer.write_event(Event::CData(BytesCData::new(description.as_str()))).map_err(archive_err)?;
    writer.write_event(Event::End(BytesEnd::new("description"))).map_err(archive_err)?;

    writer.write_event(Event::Start(BytesStart::new("Point"))).map_err(archive_err)?;
    writer.write_event(Event::Start(BytesStart::new("coordinates"))).map_err(archive_err)?;
    // Longitude before latitude is the KML coordinate order, not a typo.
    let coordinates =
        format!("{},{},{}", pole.longitude, pole.latitude, pole.altitude.unwrap_or(0.0));
    writer.write_event(Event::Text(BytesText::new(&coordinates))).map_err(archive_err)?;
    writer.write_event(Event::End(BytesEnd::new("coordinates"))).map_err(archive_err)?;
    writer.write_event(Event::End(BytesEnd::new("Point"))).map_err(archive_err)?;

    writer.write_event(Event::End(BytesEnd::new("Placemark"))).map_err(archive_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey_with_one_pole() -> SiteSurvey {
        let mut site = SiteSurvey::new_project();
        site.site_name = "Main St".to_string();
        let mut pole = PoleSurvey::at("POLE-001".into(), 40.0, -75.0, None).unwrap();
        pole.notes = "transformer & guy wire".to_string();
        site.poles.push(pole);
        site
    }

    #[test]
    fn coordinates_are_longitude_first_with_zero_altitude_default() {
        let kml = render_document(&survey_with_one_pole()).unwrap();
        assert!(kml.contains("<coordinates>-75,40,0</coordinates>"));
    }

    #[test]
    fn notes_survive_through_cdata_unescaped() {
        let kml = render_document(&survey_with_one_pole()).unwrap();
        assert!(kml.contains("<![CDATA["));
        assert!(kml.contains("<p>transformer & guy wire</p>"));
    }

    #[test]
    fn image_references_are_relative_and_numbered_in_order() {
        let mut site = survey_with_one_pole();
        let pole = &mut site.poles[0];
        for _ in 0..2 {
            pole.photos.push(osprey_core::models::SurveyPhoto::stored(
                osprey_core::models::PhotoId::new(),
                "thumb".into(),
                None,
            ));
        }

        let kml = render_document(&site).unwrap();
        let first = kml.find("images/POLE-001_IMG_1.jpg").unwrap();
        let second = kml.find("images/POLE-001_IMG_2.jpg").unwrap();
        assert!(first < second);
    }

    #[test]
    fn document_has_namespace_and_site_name() {
        let kml = render_document(&survey_with_one_pole()).unwrap();
        assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(kml.contains("xmlns=\"http://www.opengis.net/kml/2.2\""));
        assert!(kml.contains("<name>Main St</name>"));
    }
}
