/*!
# Lab Results Filter

A one-page web form for soil and water lab results: upload a spreadsheet, pick
a test type and a date range, and get back a line chart, a table and a CSV
download of the matching rows.

## Pipeline

Every request is handled from scratch; nothing is stored between requests.

1. **loader** - Reads the upload (xlsx, xls, xlsb, ods via calamine, or CSV)
2. **spreadsheet** - Normalizes headers and validates the `date`, `test_type`
   and `value` columns into typed records
3. **filter** - Extracts the test type options and applies the category and
   inclusive date-range predicates
4. **graph** / **downloader** - Projects the result into a line chart, a
   display table, CSV and XLSX exports
5. **page** / **app** - Renders the form and serves it over HTTP (`web` feature)

## Modules

- **cell**: Cell values and date/number coercion
- **spreadsheet**: `RowSet` and `Record`, header normalization
- **loader**: Upload parsing
- **filter**: Filter parameters, predicates and category extraction
- **graph**: Line chart specification and SVG rendering
- **downloader**: Table view, CSV and XLSX export
- **pipeline**: One request's worth of work, start to finish
- **page**: Template data and rendering
- **app**: Routing, handlers and listener configuration

## HTTP Endpoints

- `GET /` - Empty form
- `POST /` - Upload and filter, re-display the form with results
- `POST /download` - Filtered rows as `filtered_results.csv`
- `POST /download/xlsx` - Filtered rows as `filtered_results.xlsx`
- `POST /api/filter` - Filtered rows and chart data as JSON
*/

pub mod app;
pub mod cell;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod graph;
pub mod loader;
pub mod page;
pub mod pipeline;
pub mod spreadsheet;

pub use cell::CellValue;
pub use error::{LabError, Result};
pub use filter::{Filter, FilterParams};
pub use spreadsheet::{Record, RowSet};
